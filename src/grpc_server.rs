use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{transport::Server, Request, Response, Status};
use tracing::{error, info};

use crate::engine::InsightsEngine;
use crate::error::InsightsError;
use crate::proto::insights::{
    insights_service_server::{InsightsService, InsightsServiceServer},
    AnalyzeFileRequest, AnalyzeFileResponse, DeleteFileRequest, DeleteFileResponse,
    GetColumnPromptRequest, GetColumnPromptResponse, GetFileInsightsRequest,
    GetFileInsightsResponse, GetFileRowsRequest, GetFileRowsResponse, HealthCheckRequest,
    HealthCheckResponse, ListFilesRequest, ListFilesResponse, UploadFileRequest,
    UploadFileResponse,
};

pub struct GrpcServer {
    engine: Arc<InsightsEngine>,
}

impl GrpcServer {
    pub fn new(engine: Arc<InsightsEngine>) -> Self {
        Self { engine }
    }

    pub async fn start(&self, addr: SocketAddr) -> Result<(), InsightsError> {
        info!("Starting gRPC server on {}", addr);

        // Uploads travel inside a single message.
        let message_limit = self.engine.config().max_upload_bytes.saturating_add(64 * 1024);
        let service = InsightsServiceServer::new(InsightsServiceImpl {
            engine: self.engine.clone(),
        })
        .max_decoding_message_size(message_limit);

        Server::builder().add_service(service).serve(addr).await?;

        Ok(())
    }
}

pub struct InsightsServiceImpl {
    engine: Arc<InsightsEngine>,
}

impl InsightsServiceImpl {
    pub fn new(engine: Arc<InsightsEngine>) -> Self {
        Self { engine }
    }
}

#[tonic::async_trait]
impl InsightsService for InsightsServiceImpl {
    async fn upload_file(
        &self,
        request: Request<UploadFileRequest>,
    ) -> Result<Response<UploadFileResponse>, Status> {
        let req = request.into_inner();
        info!(
            "gRPC: Received upload_file request for '{}' ({} bytes)",
            req.filename,
            req.content.len()
        );

        match self
            .engine
            .upload_csv(&req.filename, &req.content_type, &req.content)
            .await
        {
            Ok(file) => Ok(Response::new(UploadFileResponse {
                file: Some(file.into()),
            })),
            Err(e) => {
                error!("gRPC: Failed to upload '{}': {}", req.filename, e);
                Err(Status::from(e))
            }
        }
    }

    async fn list_files(
        &self,
        _request: Request<ListFilesRequest>,
    ) -> Result<Response<ListFilesResponse>, Status> {
        info!("gRPC: Received list_files request");

        let files = self.engine.list_files().await.map_err(|e| {
            error!("gRPC: Failed to list files: {}", e);
            Status::from(e)
        })?;

        info!("gRPC: Returning {} files", files.len());
        Ok(Response::new(ListFilesResponse {
            files: files.into_iter().map(|f| f.into()).collect(),
        }))
    }

    async fn delete_file(
        &self,
        request: Request<DeleteFileRequest>,
    ) -> Result<Response<DeleteFileResponse>, Status> {
        let req = request.into_inner();
        info!("gRPC: Received delete_file request for '{}'", req.file_id);

        match self.engine.delete_file(&req.file_id).await {
            Ok(()) => Ok(Response::new(DeleteFileResponse {})),
            Err(e) => {
                error!("gRPC: Failed to delete file '{}': {}", req.file_id, e);
                Err(Status::from(e))
            }
        }
    }

    async fn get_file_rows(
        &self,
        request: Request<GetFileRowsRequest>,
    ) -> Result<Response<GetFileRowsResponse>, Status> {
        let req = request.into_inner();
        info!(
            "gRPC: Received get_file_rows request for '{}' (skip {}, limit {:?})",
            req.file_id, req.skip, req.limit
        );

        match self.engine.get_rows(&req.file_id, req.skip, req.limit).await {
            Ok(page) => Ok(Response::new(page.into())),
            Err(e) => {
                error!("gRPC: Failed to get rows of '{}': {}", req.file_id, e);
                Err(Status::from(e))
            }
        }
    }

    async fn get_file_insights(
        &self,
        request: Request<GetFileInsightsRequest>,
    ) -> Result<Response<GetFileInsightsResponse>, Status> {
        let req = request.into_inner();
        info!(
            "gRPC: Received get_file_insights request for '{}'",
            req.file_id
        );

        match self.engine.get_insights(&req.file_id).await {
            Ok(insights) => Ok(Response::new(GetFileInsightsResponse {
                insights: Some(insights.into()),
            })),
            Err(e) => {
                error!("gRPC: Failed to get insights of '{}': {}", req.file_id, e);
                Err(Status::from(e))
            }
        }
    }

    async fn get_column_prompt(
        &self,
        request: Request<GetColumnPromptRequest>,
    ) -> Result<Response<GetColumnPromptResponse>, Status> {
        let req = request.into_inner();
        info!(
            "gRPC: Received get_column_prompt request for '{}' column '{}'",
            req.file_id, req.column_name
        );

        match self
            .engine
            .column_prompt(&req.file_id, &req.column_name)
            .await
        {
            Ok(prompt) => Ok(Response::new(prompt.into())),
            Err(e) => {
                error!(
                    "gRPC: Failed to build prompt for '{}' column '{}': {}",
                    req.file_id, req.column_name, e
                );
                Err(Status::from(e))
            }
        }
    }

    async fn analyze_file(
        &self,
        request: Request<AnalyzeFileRequest>,
    ) -> Result<Response<AnalyzeFileResponse>, Status> {
        let req = request.into_inner();
        info!("gRPC: Received analyze_file request for '{}'", req.source_path);

        match self.engine.analyze_source(&req.source_path).await {
            Ok(insights) => Ok(Response::new(AnalyzeFileResponse {
                insights: Some(insights.into()),
            })),
            Err(e) => {
                error!("gRPC: Failed to analyze '{}': {}", req.source_path, e);
                Err(Status::from(e))
            }
        }
    }

    async fn health_check(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        info!("gRPC: Received health_check request");

        match self.engine.health_check().await {
            Ok(()) => {
                info!("gRPC: Health check passed");
                Ok(Response::new(HealthCheckResponse {
                    status: "healthy".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                }))
            }
            Err(e) => {
                error!("gRPC: Health check failed: {}", e);
                Err(Status::internal("Health check failed"))
            }
        }
    }
}
