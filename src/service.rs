//! The single-writer model service.
//!
//! One actor task owns the `WorkspaceModel`; every mutation flows through
//! its command queue, so no caller can observe a half-applied patch. File
//! parses run as independent blocking tasks and may overlap freely across
//! files — only the merge back into the model is serialized. Each parse
//! carries the path version captured when the change was observed; a result
//! that arrives after a newer version has been applied is discarded.

use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tokio::task;
use tracing::{info, warn};

use crate::config::LinkConfig;
use crate::error::{ModelError, Result};
use crate::graph::{self, GraphPayload, GraphStats};
use crate::model::TypeDeclaration;
use crate::parser;
use crate::protocol::{ModelMessage, ModelPatch, RegenOutcome};
use crate::workspace::WorkspaceModel;

enum Command {
    FileChanged(PathBuf),
    FileRemoved(PathBuf),
    Parsed {
        path: PathBuf,
        version: u64,
        result: Result<Vec<TypeDeclaration>>,
    },
    Commit {
        patch: ModelPatch,
        reply: oneshot::Sender<Result<RegenOutcome>>,
    },
    FullPayload {
        reply: oneshot::Sender<GraphPayload>,
    },
    Stats {
        reply: oneshot::Sender<GraphStats>,
    },
}

/// Handle to the running model service. Cloneable; all clones talk to the
/// same actor.
#[derive(Clone)]
pub struct ModelService {
    commands: mpsc::Sender<Command>,
}

impl ModelService {
    /// Spawn the actor around an initial model. Returns the handle and the
    /// stream of outbound renderer messages.
    pub fn spawn(
        model: WorkspaceModel,
        config: LinkConfig,
    ) -> (Self, mpsc::Receiver<ModelMessage>) {
        let (commands, command_rx) = mpsc::channel(64);
        let (messages, message_rx) = mpsc::channel(64);
        let internal = commands.clone();
        tokio::spawn(run(model, config, command_rx, internal, messages));
        (Self { commands }, message_rx)
    }

    /// A file was created or modified: reparse it and update the model.
    pub async fn file_changed(&self, path: PathBuf) {
        let _ = self.commands.send(Command::FileChanged(path)).await;
    }

    /// A file was deleted: drop its contribution.
    pub async fn file_removed(&self, path: PathBuf) {
        let _ = self.commands.send(Command::FileRemoved(path)).await;
    }

    /// Apply and validate a renderer patch; the returned outcome carries the
    /// regenerated text the host must write (or the file to delete).
    pub async fn commit(&self, patch: ModelPatch) -> Result<RegenOutcome> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Commit { patch, reply })
            .await
            .map_err(|_| ModelError::ServiceClosed)?;
        rx.await.map_err(|_| ModelError::ServiceClosed)?
    }

    /// The full-result message payload for the whole workspace.
    pub async fn full_payload(&self) -> Result<GraphPayload> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::FullPayload { reply })
            .await
            .map_err(|_| ModelError::ServiceClosed)?;
        rx.await.map_err(|_| ModelError::ServiceClosed)
    }

    pub async fn stats(&self) -> Result<GraphStats> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Stats { reply })
            .await
            .map_err(|_| ModelError::ServiceClosed)?;
        rx.await.map_err(|_| ModelError::ServiceClosed)
    }

    /// Blocking sends for the watcher thread, which lives outside the
    /// runtime.
    pub(crate) fn blocking_file_changed(&self, path: PathBuf) {
        let _ = self.commands.blocking_send(Command::FileChanged(path));
    }

    pub(crate) fn blocking_file_removed(&self, path: PathBuf) {
        let _ = self.commands.blocking_send(Command::FileRemoved(path));
    }
}

async fn run(
    mut model: WorkspaceModel,
    config: LinkConfig,
    mut commands: mpsc::Receiver<Command>,
    internal: mpsc::Sender<Command>,
    messages: mpsc::Sender<ModelMessage>,
) {
    info!(types = model.len(), "model service started");
    while let Some(command) = commands.recv().await {
        match command {
            Command::FileChanged(path) => {
                // Version is captured now, under the single writer; the
                // parse itself runs concurrently with everything else.
                let version = model.next_version(&path);
                let internal = internal.clone();
                task::spawn(async move {
                    let parse_path = path.clone();
                    let result = task::spawn_blocking(move || -> Result<Vec<TypeDeclaration>> {
                        let source = std::fs::read_to_string(&parse_path)?;
                        Ok(parser::parse(&source, &parse_path)?.into_vec())
                    })
                    .await
                    .unwrap_or_else(|join_error| {
                        Err(ModelError::Parse {
                            file: path.clone(),
                            message: join_error.to_string(),
                        })
                    });
                    let _ = internal
                        .send(Command::Parsed {
                            path,
                            version,
                            result,
                        })
                        .await;
                });
            }
            Command::Parsed {
                path,
                version,
                result,
            } => match result {
                Ok(types) => {
                    if model.replace_file(&path, types, version) {
                        let payload =
                            graph::build(model.types(), &config).payload_for_path(&path);
                        let _ = messages
                            .send(ModelMessage::FileUpdate { path, payload })
                            .await;
                    }
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "parse failed");
                    // Reported once; the path's contribution becomes empty.
                    if model.replace_file(&path, Vec::new(), version) {
                        let _ = messages
                            .send(ModelMessage::FileUpdate {
                                path: path.clone(),
                                payload: GraphPayload::default(),
                            })
                            .await;
                        let _ = messages
                            .send(ModelMessage::ParseFailure {
                                path,
                                message: err.to_string(),
                            })
                            .await;
                    }
                }
            },
            Command::FileRemoved(path) => {
                model.remove_file(&path);
                let _ = messages
                    .send(ModelMessage::FileUpdate {
                        path,
                        payload: GraphPayload::default(),
                    })
                    .await;
            }
            Command::Commit { patch, reply } => {
                let result = model.commit(&patch);
                if let Ok(outcome) = &result {
                    let payload = graph::build(model.types(), &config)
                        .payload_for_path(&outcome.path);
                    let _ = messages
                        .send(ModelMessage::FileUpdate {
                            path: outcome.path.clone(),
                            payload,
                        })
                        .await;
                }
                let _ = reply.send(result);
            }
            Command::FullPayload { reply } => {
                let _ = reply.send(graph::build(model.types(), &config).payload());
            }
            Command::Stats { reply } => {
                let _ = reply.send(graph::build(model.types(), &config).stats());
            }
        }
    }
    info!("model service stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::workspace::scan;
    use std::fs;
    use std::time::Duration;

    async fn next_update(
        rx: &mut mpsc::Receiver<ModelMessage>,
    ) -> ModelMessage {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("update within timeout")
            .expect("channel open")
    }

    #[tokio::test]
    async fn file_change_flows_into_an_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.cs");
        fs::write(&path, "namespace N { public class A { } }").unwrap();

        let (model, _) = scan::scan_workspace(dir.path());
        let (service, mut updates) = ModelService::spawn(model, LinkConfig::default());

        fs::write(&path, "namespace N { public class A { public int X; } }").unwrap();
        service.file_changed(path.clone()).await;

        let message = next_update(&mut updates).await;
        let ModelMessage::FileUpdate {
            path: update_path,
            payload,
        } = message
        else {
            panic!("expected a file update");
        };
        assert_eq!(update_path, path);
        assert!(payload
            .nodes
            .iter()
            .any(|n| n.kind == NodeKind::Field && n.label == "X"));
    }

    #[tokio::test]
    async fn parse_failure_empties_the_path_and_reports_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.cs");
        fs::write(&path, "namespace N { public class A { } }").unwrap();

        let (model, _) = scan::scan_workspace(dir.path());
        let (service, mut updates) = ModelService::spawn(model, LinkConfig::default());

        fs::write(&path, "namespace N { class {{{").unwrap();
        service.file_changed(path.clone()).await;

        let update = next_update(&mut updates).await;
        let ModelMessage::FileUpdate { payload, .. } = update else {
            panic!("expected the emptying update first");
        };
        assert!(payload.nodes.is_empty());

        let failure = next_update(&mut updates).await;
        let ModelMessage::ParseFailure { path: failed, message } = failure else {
            panic!("expected a parse failure report");
        };
        assert_eq!(failed, path);
        assert!(message.contains("syntax error"));

        let full = service.full_payload().await.unwrap();
        assert!(full.nodes.is_empty(), "contribution is empty after failure");
    }

    #[tokio::test]
    async fn file_removal_clears_contribution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.cs");
        fs::write(&path, "namespace N { public class A { } }").unwrap();

        let (model, _) = scan::scan_workspace(dir.path());
        let (service, mut updates) = ModelService::spawn(model, LinkConfig::default());
        assert_eq!(service.stats().await.unwrap().type_count, 1);

        service.file_removed(path).await;
        let ModelMessage::FileUpdate { payload, .. } = next_update(&mut updates).await else {
            panic!("expected an update");
        };
        assert!(payload.nodes.is_empty());
        assert_eq!(service.stats().await.unwrap().type_count, 0);
    }

    #[tokio::test]
    async fn commit_round_trips_through_the_service() {
        use crate::model::MemberKind;
        use crate::protocol::{ComponentLocation, ModelPatch, NodeEdit};
        use std::collections::HashMap;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.cs");
        fs::write(
            &path,
            "namespace N { public class A { public void Run() { } } }",
        )
        .unwrap();

        let (model, _) = scan::scan_workspace(dir.path());
        let (service, mut updates) = ModelService::spawn(model, LinkConfig::default());

        let patch = ModelPatch::Edit(NodeEdit {
            location: ComponentLocation::Member {
                namespace: "N".to_string(),
                type_name: "A".to_string(),
                member_kind: MemberKind::Method,
                index: 0,
            },
            fields: HashMap::from([("name".to_string(), serde_json::json!("Renamed"))]),
        });
        let outcome = service.commit(patch).await.unwrap();
        assert!(outcome.text.unwrap().contains("public void Renamed()"));

        let ModelMessage::FileUpdate { payload, .. } = next_update(&mut updates).await else {
            panic!("expected an update");
        };
        assert!(payload
            .nodes
            .iter()
            .any(|n| n.kind == NodeKind::Method && n.label == "Renamed"));
    }
}
