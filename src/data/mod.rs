mod load;
mod model;

pub use load::load_model;
pub use model::{
    BucketEntry, ClusterOverlay, EdgeKind, EllipseShape, GraphEdge, GraphModel, GraphNode,
    NodeKind,
};
