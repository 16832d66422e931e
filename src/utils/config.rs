pub const SUPABASE_URL: &str = env!("SUPABASE_URL");
pub const SUPABASE_ANON_KEY: &str = env!("SUPABASE_ANON_KEY");

/// Protocol version spoken on the realtime websocket.
const REALTIME_VSN: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq)]
pub struct SupabaseConfig {
  base_url: String,
  anon_key: String,
}

impl SupabaseConfig {
  pub fn new(base_url: &str, anon_key: &str) -> Self {
    Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      anon_key: anon_key.to_string(),
    }
  }

  /// Configuration baked in at compile time by `build.rs`.
  pub fn from_env() -> Self {
    Self::new(SUPABASE_URL, SUPABASE_ANON_KEY)
  }

  pub fn anon_key(&self) -> &str {
    &self.anon_key
  }

  pub fn rest_url(&self, table: &str) -> String {
    format!("{}/rest/v1/{}", self.base_url, table)
  }

  pub fn auth_url(&self, path: &str) -> String {
    format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
  }

  pub fn realtime_url(&self) -> String {
    let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
      format!("wss://{}", rest)
    } else if let Some(rest) = self.base_url.strip_prefix("http://") {
      format!("ws://{}", rest)
    } else {
      self.base_url.clone()
    };
    format!("{}/realtime/v1/websocket?apikey={}&vsn={}", ws_base, self.anon_key, REALTIME_VSN)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn derives_service_urls_from_base() {
    let cfg = SupabaseConfig::new("https://abc.supabase.co/", "anon");
    assert_eq!(cfg.rest_url("market_data"), "https://abc.supabase.co/rest/v1/market_data");
    assert_eq!(cfg.auth_url("/token?grant_type=password"), "https://abc.supabase.co/auth/v1/token?grant_type=password");
    assert_eq!(cfg.realtime_url(), "wss://abc.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0");
  }

  #[test]
  fn plain_http_maps_to_plain_ws() {
    let cfg = SupabaseConfig::new("http://localhost:54321", "k");
    assert_eq!(cfg.realtime_url(), "ws://localhost:54321/realtime/v1/websocket?apikey=k&vsn=1.0.0");
  }
}
