//! Renderer bridge
//!
//! Request/response messages exchanged with a renderer, and the bridge trait
//! the runtime uses to deliver them. The interpreter never talks to a renderer
//! directly: an element suspends with an [`RdrRequest`], the host performs the
//! round trip and delivers the [`RdrResponse`] back to the coroutine.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::variant::Val;

/* ===================== Status Codes ===================== */

pub const STATUS_OK: u16 = 200;
pub const STATUS_ACCEPTED: u16 = 202;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_NOT_ACCEPTABLE: u16 = 406;
pub const STATUS_INTERNAL_ERROR: u16 = 500;
pub const STATUS_NOT_IMPLEMENTED: u16 = 501;
pub const STATUS_SERVICE_UNAVAILABLE: u16 = 503;

/* ===================== Operations ===================== */

pub const OP_APPEND: &str = "append";
pub const OP_PREPEND: &str = "prepend";
pub const OP_INSERT_BEFORE: &str = "insertBefore";
pub const OP_INSERT_AFTER: &str = "insertAfter";
pub const OP_DISPLACE: &str = "displace";
pub const OP_UPDATE: &str = "update";
pub const OP_ERASE: &str = "erase";
pub const OP_CLEAR: &str = "clear";

/* ===================== Messages ===================== */

/// What a request addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RdrTarget {
    Session,
    Workspace,
    PlainWindow,
    TabbedWindow,
    TabPage,
    Dom,
}

/// How `element` identifies the element inside the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RdrElementType {
    #[default]
    Void,
    Handle,
    Id,
}

/// Typed payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum RdrData {
    #[default]
    Void,
    Text(String),
    Json(Val),
}

impl RdrData {
    /// Payload carried by a value: strings go as text, everything else as JSON
    pub fn from_val(value: Val) -> Self {
        match value {
            Val::Null => RdrData::Void,
            Val::Str(s) => RdrData::Text(s),
            other => RdrData::Json(other),
        }
    }

    pub fn into_val(self) -> Val {
        match self {
            RdrData::Void => Val::Null,
            RdrData::Text(s) => Val::Str(s),
            RdrData::Json(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdrRequest {
    pub request_id: Uuid,
    pub target: RdrTarget,
    pub target_value: u64,
    pub operation: String,
    pub element_type: RdrElementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default)]
    pub data: RdrData,
}

impl RdrRequest {
    pub fn new(target: RdrTarget, target_value: u64, operation: impl Into<String>) -> Self {
        RdrRequest {
            request_id: Uuid::new_v4(),
            target,
            target_value,
            operation: operation.into(),
            element_type: RdrElementType::Void,
            element: None,
            property: None,
            data: RdrData::Void,
        }
    }

    /// Address an element by handle (`"0x1a"`) or by id (`"#main"`)
    pub fn on_element(mut self, element: &str) -> Self {
        match element.strip_prefix('#') {
            Some(id) => {
                self.element_type = RdrElementType::Id;
                self.element = Some(id.to_string());
            }
            None => {
                self.element_type = RdrElementType::Handle;
                self.element = Some(element.to_string());
            }
        }
        self
    }

    pub fn at_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn with_data(mut self, data: RdrData) -> Self {
        self.data = data;
        self
    }

    /* -------- DOM builders -------- */

    pub fn dom_append(dom: u64, element: &str, content: impl Into<String>) -> Self {
        RdrRequest::new(RdrTarget::Dom, dom, OP_APPEND)
            .on_element(element)
            .with_data(RdrData::Text(content.into()))
    }

    pub fn dom_displace(dom: u64, element: &str, content: impl Into<String>) -> Self {
        RdrRequest::new(RdrTarget::Dom, dom, OP_DISPLACE)
            .on_element(element)
            .with_data(RdrData::Text(content.into()))
    }

    pub fn dom_update(dom: u64, element: &str, property: &str, value: Val) -> Self {
        RdrRequest::new(RdrTarget::Dom, dom, OP_UPDATE)
            .on_element(element)
            .at_property(property)
            .with_data(RdrData::from_val(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdrResponse {
    pub request_id: Uuid,
    pub ret_code: u16,
    #[serde(default)]
    pub result_value: u64,
    #[serde(default)]
    pub data: RdrData,
}

impl RdrResponse {
    pub fn ok(request: &RdrRequest, data: RdrData) -> Self {
        RdrResponse {
            request_id: request.request_id,
            ret_code: STATUS_OK,
            result_value: 0,
            data,
        }
    }

    pub fn status(request: &RdrRequest, ret_code: u16) -> Self {
        RdrResponse {
            request_id: request.request_id,
            ret_code,
            result_value: 0,
            data: RdrData::Void,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ret_code == STATUS_OK
    }
}

/* ===================== Bridge ===================== */

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("renderer connection lost: {0}")]
    Disconnected(String),

    #[error("renderer refused request: {0}")]
    Refused(String),
}

/// Synchronous request/response channel to a renderer
pub trait RendererBridge: Send {
    /// Send `request` and block until its response arrives or `timeout` passes
    fn send_request_and_wait(
        &mut self,
        request: &RdrRequest,
        timeout: Duration,
    ) -> Result<RdrResponse, BridgeError>;
}

/// In-process renderer that acknowledges every request
///
/// `update` requests echo their payload back; everything else replies with an
/// empty payload.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    requests: Vec<RdrRequest>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[RdrRequest] {
        &self.requests
    }
}

impl RendererBridge for HeadlessRenderer {
    fn send_request_and_wait(
        &mut self,
        request: &RdrRequest,
        _timeout: Duration,
    ) -> Result<RdrResponse, BridgeError> {
        debug!(
            operation = %request.operation,
            request_id = %request.request_id,
            "headless renderer request"
        );
        self.requests.push(request.clone());

        let data = if request.operation == OP_UPDATE {
            request.data.clone()
        } else {
            RdrData::Void
        };
        Ok(RdrResponse::ok(request, data))
    }
}
