//! Line protocol spoken on stdin/stdout.
//!
//! Each stdin line is one JSON [`Request`]; each reply is one JSON [`Reply`]
//! line. Mesh events are written as [`guardiangrid_mesh::Envelope`] lines on
//! the same stream.

use guardiangrid_mesh::{
    MeshHandle, MeshNode, MeshResult, MessagePacket, NodeHandle, ProofReport, SendOutcome,
    StatsReport,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Request {
    Register {
        handle: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Heartbeat { node_id: String },
    #[serde(rename_all = "camelCase")]
    Connect { node_id: String, target_id: String },
    Send {
        from: String,
        to: String,
        #[serde(rename = "type")]
        message_type: String,
        #[serde(default)]
        content: Value,
    },
    #[serde(rename_all = "camelCase")]
    Disconnect { node_id: String },
    Topology,
    Stats,
    Proof,
    History,
}

#[derive(Debug, Serialize)]
#[serde(tag = "reply", content = "data", rename_all = "lowercase")]
pub enum Reply {
    Registered(MeshNode),
    Heartbeat { accepted: bool },
    Connected { linked: bool },
    Sent(SendOutcome),
    Disconnected(Option<MeshNode>),
    Topology(Vec<MeshNode>),
    Stats(StatsReport),
    Proof(ProofReport),
    History(Vec<MessagePacket>),
    Error { message: String },
}

impl Reply {
    pub(crate) fn error(err: impl std::fmt::Display) -> Self {
        Reply::Error {
            message: err.to_string(),
        }
    }
}

/// Parse one input line and run it against the mesh
pub async fn dispatch(mesh: &MeshHandle, line: &str) -> Reply {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed command line");
            return Reply::error(e);
        }
    };
    debug!(?request, "Command received");

    match execute(mesh, request).await {
        Ok(reply) => reply,
        Err(e) => {
            debug!(error = %e, "Command rejected");
            Reply::error(e)
        }
    }
}

async fn execute(mesh: &MeshHandle, request: Request) -> MeshResult<Reply> {
    let reply = match request {
        Request::Register { handle, name, id } => {
            let handle = NodeHandle::new(handle);
            let node = match id {
                Some(id) => mesh.register_as(&id, &name, handle).await?,
                None => mesh.register(&name, handle).await?,
            };
            Reply::Registered(node)
        }
        Request::Heartbeat { node_id } => Reply::Heartbeat {
            accepted: mesh.heartbeat(&node_id).await?,
        },
        Request::Connect { node_id, target_id } => Reply::Connected {
            linked: mesh.connect(&node_id, &target_id).await?,
        },
        Request::Send {
            from,
            to,
            message_type,
            content,
        } => Reply::Sent(mesh.send_wire(&from, &to, &message_type, content).await?),
        Request::Disconnect { node_id } => Reply::Disconnected(mesh.disconnect(&node_id).await?),
        Request::Topology => Reply::Topology(mesh.topology().await?),
        Request::Stats => Reply::Stats(mesh.stats().await?),
        Request::Proof => Reply::Proof(mesh.proof().await?),
        Request::History => Reply::History(mesh.recent_messages().await?),
    };
    Ok(reply)
}
