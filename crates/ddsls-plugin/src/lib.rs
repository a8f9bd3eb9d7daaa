//! Deployment-time instrumentation of a serverless service for Datadog.
//!
//! Every transformation works on the untyped service document and the
//! compiled deployment template; [`instrument`] sequences them.

pub mod config;
pub mod document;
pub mod env;
pub mod forwarder;
pub mod handlers;
pub mod instrument;
pub mod layers;
pub mod monitors;
pub mod outputs;
pub mod tags;
pub mod xray;

pub use config::{
    load_service_document, parse_service_document, validate_configuration, ConfigError, Configuration,
};
pub use document::ServiceContext;
pub use env::set_env_configuration;
pub use forwarder::add_forwarder_subscriptions;
pub use handlers::{redirect_handlers, wrapper_handler};
pub use instrument::{instrument, InstrumentOptions, InstrumentReport, PluginError};
pub use layers::{apply_layers, find_handlers, AttachedLayer, FunctionInfo, LayerTable, LayerTableError, RuntimeType};
pub use monitors::{build_monitor_params, build_monitor_requests, MonitorError, MonitorRequest};
pub use outputs::add_output_links;
pub use tags::add_service_and_env_tags;
pub use xray::enable_tracing;
