pub mod proto {
    pub mod insights {
        tonic::include_proto!("insights");
    }
}

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod database;
pub mod domain;
pub mod engine;
pub mod error;
pub mod grpc_server;
pub mod insights;
pub mod memory;
pub mod models;
pub mod projector;
pub mod prompt;
pub mod schema;
pub mod source;
pub mod store;
pub mod table;

pub use engine::InsightsEngine;
pub use error::InsightsError;
pub use grpc_server::GrpcServer;
