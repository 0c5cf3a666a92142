pub mod context;
pub mod server;
pub mod views;

pub use context::{DashboardContext, price_distribution};
pub use server::{router, run_cli_check, serve};
pub use views::{PredictForm, format_price, format_thousands, render_page};
