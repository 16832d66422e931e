pub mod icons;
pub mod instruction_form;
pub mod instruction_tracker;
pub mod loading;
pub mod market_data;
