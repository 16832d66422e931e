use dotenvy::dotenv;

const DEFAULT_SUPABASE_URL: &str = "http://localhost:54321";

fn main() {
  // Tell Cargo that if the env file changes, to rerun this build script.
  println!("cargo::rerun-if-changed=.env");
  println!("cargo::rerun-if-env-changed=SUPABASE_URL");
  println!("cargo::rerun-if-env-changed=SUPABASE_ANON_KEY");

  if dotenv().is_err() {
    println!("cargo::warning=no .env file found, falling back to process environment");
  }

  match std::env::var("SUPABASE_URL") {
    Ok(url) => println!("cargo::rustc-env=SUPABASE_URL={}", url),
    Err(_) => {
      println!("cargo::warning=SUPABASE_URL not set, using {}", DEFAULT_SUPABASE_URL);
      println!("cargo::rustc-env=SUPABASE_URL={}", DEFAULT_SUPABASE_URL);
    }
  }

  match std::env::var("SUPABASE_ANON_KEY") {
    Ok(key) => println!("cargo::rustc-env=SUPABASE_ANON_KEY={}", key),
    Err(_) => {
      println!("cargo::warning=SUPABASE_ANON_KEY not set, requests will be rejected by the backend");
      println!("cargo::rustc-env=SUPABASE_ANON_KEY=");
    }
  }
}
