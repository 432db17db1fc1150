pub mod alpha_vantage;
pub mod exchange_rate;
pub mod sec_edgar;
pub mod util;
pub mod yahoo_finance;
