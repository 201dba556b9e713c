pub mod app;
pub mod session;

pub use app::AppConfig;
pub use session::{
    spawn_expired_session_cleanup, validate_production_config, SessionConfig, SessionLayer,
};
