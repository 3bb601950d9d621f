//! Docker Compose orchestration operations
//!
//! Thin named operations over the [`ComposeGateway`]: build, start, stop,
//! status, logs and compose-file validation.

use std::sync::Arc;
use tracing::warn;

use super::status_parser::StatusParser;
use crate::domain::compose::{CommandSpec, ComposeVerb, ExecutionResult, ServiceStatusSnapshot};
use crate::infra::ComposeGateway;

/// Orchestration operations
#[derive(Clone)]
pub struct Orchestrator {
    gateway: ComposeGateway,
    status_parser: Arc<dyn StatusParser>,
}

impl Orchestrator {
    pub fn new(gateway: ComposeGateway, status_parser: Arc<dyn StatusParser>) -> Self {
        Self {
            gateway,
            status_parser,
        }
    }

    /// `build`
    pub async fn build(&self, compose_file: &str) -> ExecutionResult {
        self.gateway
            .execute(&CommandSpec::new(ComposeVerb::Build.as_str(), compose_file))
            .await
    }

    /// `up -d`, with optional profiles (e.g. `auth` for the oauth2 proxy)
    pub async fn start(&self, compose_file: &str, profiles: &[String]) -> ExecutionResult {
        let spec = CommandSpec::new(ComposeVerb::Up.as_str(), compose_file)
            .with_profiles(profiles.to_vec())
            .option("-d");
        self.gateway.execute(&spec).await
    }

    /// `down`
    pub async fn stop(&self, compose_file: &str) -> ExecutionResult {
        self.gateway
            .execute(&CommandSpec::new(ComposeVerb::Down.as_str(), compose_file))
            .await
    }

    /// `config --quiet`: true when the compose file parses
    pub async fn validate_compose_file(&self, compose_file: &str) -> ExecutionResult {
        let spec = CommandSpec::new(ComposeVerb::Config.as_str(), compose_file).option("--quiet");
        self.gateway.execute(&spec).await
    }

    /// `ps`, parsed into a snapshot
    ///
    /// A whitelist rejection is returned as `Err`; any other failure degrades
    /// to an empty, not-running snapshot.
    pub async fn status(&self, compose_file: &str) -> Result<ServiceStatusSnapshot, ExecutionResult> {
        let result = self
            .gateway
            .execute(&CommandSpec::new(ComposeVerb::Ps.as_str(), compose_file))
            .await;

        if result.is_rejected() {
            return Err(result);
        }

        if !result.success {
            warn!(
                compose_file = %compose_file,
                reason = result.failure_reason().unwrap_or_default(),
                "Status query failed, reporting services as stopped"
            );
            return Ok(ServiceStatusSnapshot::default());
        }

        Ok(self.status_parser.parse(&result.stdout))
    }

    /// `logs --tail=<n> [service]`
    pub async fn logs(&self, compose_file: &str, service: Option<&str>, tail: u32) -> ExecutionResult {
        let mut spec = CommandSpec::new(ComposeVerb::Logs.as_str(), compose_file)
            .option(format!("--tail={}", tail));
        if let Some(service) = service.filter(|s| !s.is_empty()) {
            spec = spec.service(service);
        }
        self.gateway.execute(&spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compose::FailureKind;
    use crate::infra::command::CapturedOutput;
    use crate::infra::compose_gateway::tests::{gateway, RecordingRunner};
    use crate::services::status_parser::PsTableParser;

    fn orchestrator(runner: Arc<RecordingRunner>) -> Orchestrator {
        Orchestrator::new(gateway(runner), Arc::new(PsTableParser::default()))
    }

    #[tokio::test]
    async fn test_build_args() {
        let runner = Arc::new(RecordingRunner::default());
        let result = orchestrator(runner.clone()).build("docker-compose.yml").await;
        assert!(result.success);
        assert_eq!(runner.last_args(), ["compose", "-f", "docker-compose.yml", "build"]);
    }

    #[tokio::test]
    async fn test_start_with_profiles() {
        let runner = Arc::new(RecordingRunner::default());
        orchestrator(runner.clone())
            .start("docker-compose.production.yml", &["auth".to_string()])
            .await;
        assert_eq!(
            runner.last_args(),
            ["compose", "-f", "docker-compose.production.yml", "--profile", "auth", "up", "-d"]
        );
    }

    #[tokio::test]
    async fn test_start_without_profiles() {
        let runner = Arc::new(RecordingRunner::default());
        orchestrator(runner.clone()).start("docker-compose.yml", &[]).await;
        assert_eq!(runner.last_args(), ["compose", "-f", "docker-compose.yml", "up", "-d"]);
    }

    #[tokio::test]
    async fn test_stop_and_validate() {
        let runner = Arc::new(RecordingRunner::default());
        let orch = orchestrator(runner.clone());
        orch.stop("docker-compose.yml").await;
        assert_eq!(runner.last_args(), ["compose", "-f", "docker-compose.yml", "down"]);
        orch.validate_compose_file("docker-compose.auth.yml").await;
        assert_eq!(
            runner.last_args(),
            ["compose", "-f", "docker-compose.auth.yml", "config", "--quiet"]
        );
    }

    #[tokio::test]
    async fn test_logs_with_service() {
        let runner = Arc::new(RecordingRunner::default());
        orchestrator(runner.clone())
            .logs("docker-compose.yml", Some("obsidian"), 50)
            .await;
        assert_eq!(
            runner.last_args(),
            ["compose", "-f", "docker-compose.yml", "logs", "--tail=50", "obsidian"]
        );
    }

    #[tokio::test]
    async fn test_logs_injection_attempt_rejected() {
        let runner = Arc::new(RecordingRunner::default());
        let result = orchestrator(runner.clone())
            .logs("docker-compose.yml", Some("web; rm -rf /"), 50)
            .await;
        assert_eq!(result.failure_kind(), Some(FailureKind::Rejected));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_status_parses_output() {
        let runner = Arc::new(RecordingRunner::with_stdout(
            "NAME STATUS\n----\nweb-1   Up 2 minutes\n",
        ));
        let snapshot = orchestrator(runner).status("docker-compose.yml").await.unwrap();
        assert!(snapshot.running);
        assert_eq!(snapshot.services, ["web-1"]);
    }

    #[tokio::test]
    async fn test_status_failure_is_not_running() {
        let runner = Arc::new(RecordingRunner::with_output(CapturedOutput {
            exit_code: Some(1),
            stderr: b"Cannot connect to the Docker daemon".to_vec(),
            ..Default::default()
        }));
        let snapshot = orchestrator(runner).status("docker-compose.yml").await.unwrap();
        assert_eq!(snapshot, ServiceStatusSnapshot::default());
    }

    #[tokio::test]
    async fn test_status_rejection_surfaces() {
        let runner = Arc::new(RecordingRunner::default());
        let err = orchestrator(runner.clone())
            .status("../../etc/compose.yml")
            .await
            .unwrap_err();
        assert!(err.is_rejected());
        assert_eq!(runner.call_count(), 0);
    }
}
