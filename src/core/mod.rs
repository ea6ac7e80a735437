pub mod context;
pub mod host_rewrite;

pub use context::{DownstreamRouteHolder, RoutingContext};
pub use host_rewrite::{apply_host_header, resolve_host_replacement};
