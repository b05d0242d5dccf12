//! Connector factory registry and the scripted mock connector.

mod mock;
mod registry;

pub use mock::{ScriptedConnector, ScriptedConnectorFactory};
pub use registry::ConnectorRegistry;
