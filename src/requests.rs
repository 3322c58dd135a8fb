// Connection and contribution requests
// Fire one request per user action and report the outcome as exactly one toast.

use log::{error, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::SocialApi;
use crate::error::SyncError;
use crate::models::{RequestTarget, ToastKind};
use crate::toast::Toaster;

pub const CONNECTION_SENT: &str = "Request Sent Successfully";
pub const CONTRIBUTION_SENT: &str = "Request sent successfully";
pub const GENERIC_FAILURE: &str = "Something went wrong";
pub const NETWORK_FAILURE: &str = "Network error";

/// How a request ended, as reported to the toast slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub kind: ToastKind,
    pub message: String,
}

impl RequestOutcome {
    pub fn succeeded(&self) -> bool {
        self.kind == ToastKind::Success
    }
}

/// Removes the target from the in-flight set however the call ends
struct InFlightGuard {
    set: Arc<Mutex<HashSet<RequestTarget>>>,
    target: RequestTarget,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.target);
    }
}

#[derive(Clone)]
pub struct RequestService {
    api: Arc<dyn SocialApi>,
    toaster: Toaster,
    in_flight: Arc<Mutex<HashSet<RequestTarget>>>,
}

impl RequestService {
    pub fn new(api: Arc<dyn SocialApi>, toaster: Toaster) -> Self {
        RequestService {
            api,
            toaster,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Ask `receiver_id` to connect
    pub async fn send(&self, receiver_id: &str) -> Result<RequestOutcome, SyncError> {
        if receiver_id.trim().is_empty() {
            return Err(SyncError::MissingIdentifier("receiverId"));
        }
        let target = RequestTarget::Connection {
            receiver_id: receiver_id.to_string(),
        };
        self.submit(target, CONNECTION_SENT).await
    }

    /// Ask to join project `proj_id` as a contributor
    pub async fn send_contribution(&self, proj_id: &str) -> Result<RequestOutcome, SyncError> {
        if proj_id.trim().is_empty() {
            return Err(SyncError::MissingIdentifier("projId"));
        }
        let target = RequestTarget::Contribution {
            proj_id: proj_id.to_string(),
        };
        self.submit(target, CONTRIBUTION_SENT).await
    }

    pub fn is_pending(&self, target: &RequestTarget) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(target)
    }

    async fn submit(&self, target: RequestTarget, success_default: &str) -> Result<RequestOutcome, SyncError> {
        let _guard = self.reserve(target.clone())?;
        info!("Sending {}", target);

        let result = match &target {
            RequestTarget::Connection { receiver_id } => self.api.send_connection_request(receiver_id).await,
            RequestTarget::Contribution { proj_id } => self.api.send_contribution_request(proj_id).await,
        };

        let outcome = match result {
            Ok(message) => RequestOutcome {
                kind: ToastKind::Success,
                message: message.unwrap_or_else(|| success_default.to_string()),
            },
            Err(SyncError::Network(e)) => {
                error!("{} failed in transport: {}", target, e);
                RequestOutcome {
                    kind: ToastKind::Error,
                    message: NETWORK_FAILURE.to_string(),
                }
            }
            Err(e) => {
                warn!("{} was rejected: {}", target, e);
                RequestOutcome {
                    kind: ToastKind::Error,
                    message: e.server_message().unwrap_or(GENERIC_FAILURE).to_string(),
                }
            }
        };

        self.toaster.show(outcome.message.clone(), outcome.kind);
        Ok(outcome)
    }

    fn reserve(&self, target: RequestTarget) -> Result<InFlightGuard, SyncError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(target.clone()) {
            warn!("Ignoring duplicate {}", target);
            return Err(SyncError::DuplicateRequest(target.to_string()));
        }
        Ok(InFlightGuard {
            set: self.in_flight.clone(),
            target,
        })
    }
}
