pub mod config;
pub mod format;
pub mod logger;
pub mod refresh;

pub use config::{load_dashboard, resolve_config_path, save_dashboard};
pub use format::format_value;
pub use logger::init_logging;
pub use refresh::{WidgetRefresher, WidgetSnapshot};
