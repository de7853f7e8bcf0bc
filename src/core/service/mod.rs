pub mod endpoint;
pub mod resolver;

pub use endpoint::{default_mirrors, ServiceEndpoint, DEFAULT_MAVEN_SERVER, DEFAULT_META_SERVER};
pub use resolver::EndpointResolver;
