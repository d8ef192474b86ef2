//! Market data: historical daily bars and the error type shared by the
//! network and storage layers

pub mod errors;
pub mod market;

pub use errors::{DataError, DataResult};
pub use market::{
    fetch_previous_session, parse_chart_response, select_previous_session, BarSource, DailyBar,
    YahooBarSource,
};
