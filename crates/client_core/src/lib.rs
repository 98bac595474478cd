use std::collections::HashMap;

use async_trait::async_trait;
use shared::{
    chain::ReplacementChain,
    domain::{ChildId, ChildKind, EncounterId, UserId},
    draft::ChildDraft,
    protocol::{
        CancelRequest, ChildPayload, ChildRecord, Encounter, FulfilRequest, ReplaceRequest,
        SignRequest,
    },
};
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod transport;
pub mod types;
pub mod view;

pub use error::{ErrorCategory, WorkflowError};
pub use transport::HttpRecordBackend;
pub use types::OperatorIdentity;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Records API the controller consumes. Paths and payload shapes are owned by
/// the server; implementations only translate calls and errors.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    async fn fetch_encounter(&self, encounter_id: &EncounterId) -> WorkflowResult<Encounter>;
    async fn list_assigned_encounters(&self, doctor_id: UserId) -> WorkflowResult<Vec<Encounter>>;
    async fn list_children(
        &self,
        encounter_id: &EncounterId,
        kind: ChildKind,
    ) -> WorkflowResult<Vec<ChildRecord>>;
    async fn create_child(
        &self,
        encounter_id: &EncounterId,
        payload: &ChildPayload,
    ) -> WorkflowResult<ChildRecord>;
    async fn fetch_child(&self, kind: ChildKind, child_id: ChildId) -> WorkflowResult<ChildRecord>;
    async fn sign_child(
        &self,
        kind: ChildKind,
        child_id: ChildId,
        request: &SignRequest,
    ) -> WorkflowResult<ChildRecord>;
    async fn replace_child(
        &self,
        kind: ChildKind,
        child_id: ChildId,
        request: &ReplaceRequest,
    ) -> WorkflowResult<ChildRecord>;
    async fn fulfil_child(
        &self,
        kind: ChildKind,
        child_id: ChildId,
        request: &FulfilRequest,
    ) -> WorkflowResult<ChildRecord>;
    async fn cancel_child(
        &self,
        kind: ChildKind,
        child_id: ChildId,
        request: &CancelRequest,
    ) -> WorkflowResult<ChildRecord>;
    async fn replacement_history(
        &self,
        kind: ChildKind,
        child_id: ChildId,
    ) -> WorkflowResult<Vec<ChildRecord>>;
}

/// Search-then-detail workflow over one encounter and its child records.
///
/// Every stateful operation takes `&mut self`, so a response for a previous
/// encounter can never land after the search has moved on.
pub struct RecordWorkflowController<B: RecordBackend> {
    backend: B,
    operator: OperatorIdentity,
    parent: Option<Encounter>,
    children: HashMap<ChildKind, Vec<ChildRecord>>,
    open_list: Option<ChildKind>,
}

impl<B: RecordBackend> RecordWorkflowController<B> {
    pub fn new(backend: B, operator: OperatorIdentity) -> Self {
        Self {
            backend,
            operator,
            parent: None,
            children: HashMap::new(),
            open_list: None,
        }
    }

    pub fn operator(&self) -> &OperatorIdentity {
        &self.operator
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn parent(&self) -> Option<&Encounter> {
        self.parent.as_ref()
    }

    /// Last fetched collection for `kind`; empty until listed.
    pub fn children(&self, kind: ChildKind) -> &[ChildRecord] {
        self.children.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn open_list(&self) -> Option<ChildKind> {
        self.open_list
    }

    pub fn close_list(&mut self) {
        self.open_list = None;
    }

    pub async fn resolve_parent(&mut self, raw_id: &str) -> WorkflowResult<&Encounter> {
        let Some(encounter_id) = EncounterId::parse(raw_id) else {
            return Err(WorkflowError::validation("encounter id must not be blank"));
        };

        match self.backend.fetch_encounter(&encounter_id).await {
            Ok(encounter) => {
                info!(%encounter_id, patient = %encounter.patient.full_name, "encounter resolved");
                self.clear_children();
                Ok(self.parent.insert(encounter))
            }
            Err(err @ WorkflowError::NotFound { .. }) => {
                // The old encounter's records no longer match the search box.
                self.parent = None;
                self.clear_children();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Encounters assigned to the injected operator.
    pub async fn assigned_parents(&self) -> WorkflowResult<Vec<Encounter>> {
        self.backend.list_assigned_encounters(self.operator.user_id).await
    }

    pub async fn list_children(
        &mut self,
        parent_id: &EncounterId,
        kind: ChildKind,
    ) -> WorkflowResult<&[ChildRecord]> {
        self.ensure_parent(parent_id)?;
        let records = self.backend.list_children(parent_id, kind).await?;
        self.open_list = Some(kind);
        self.children.insert(kind, records);
        Ok(self.children(kind))
    }

    pub async fn create_child(
        &mut self,
        parent_id: &EncounterId,
        draft: &ChildDraft,
    ) -> WorkflowResult<ChildRecord> {
        let payload = draft.validate()?;
        self.ensure_parent(parent_id)?;

        let kind = payload.kind();
        let created = self.backend.create_child(parent_id, &payload).await?;
        info!(
            encounter_id = %parent_id,
            %kind,
            child_id = %created.child_id,
            status = %created.status,
            "record created"
        );
        self.refresh_if_open(kind).await;
        Ok(created)
    }

    /// Irreversibly signs a draft or pending record as the operator.
    ///
    /// Callers are expected to have asked the operator to confirm first.
    pub async fn sign_child(
        &mut self,
        child_id: ChildId,
        kind: ChildKind,
    ) -> WorkflowResult<ChildRecord> {
        let current = self.backend.fetch_child(kind, child_id).await?;
        if !current.status.can_sign() {
            return Err(WorkflowError::conflict(format!(
                "{kind} {child_id} is {} and cannot be signed",
                current.status
            )));
        }

        let request = SignRequest {
            signed_by: self.operator.user_id,
        };
        let signed = self.backend.sign_child(kind, child_id, &request).await?;
        info!(%kind, %child_id, signed_by = %self.operator.user_id, "record signed");
        self.refresh_if_open(kind).await;
        Ok(signed)
    }

    /// Supersedes a signed record with a new version carrying `draft`.
    pub async fn replace_child(
        &mut self,
        child_id: ChildId,
        kind: ChildKind,
        reason: &str,
        draft: &ChildDraft,
    ) -> WorkflowResult<ChildRecord> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::validation(
                "a reason is required to replace a signed record",
            ));
        }
        if draft.kind() != kind {
            return Err(WorkflowError::validation(format!(
                "a {} cannot replace a {kind}",
                draft.kind()
            )));
        }
        let payload = draft.validate()?;

        let current = self.backend.fetch_child(kind, child_id).await?;
        if !current.status.can_replace() {
            return Err(WorkflowError::conflict(format!(
                "{kind} {child_id} is {}; only signed records can be replaced",
                current.status
            )));
        }

        let request = ReplaceRequest {
            reason: reason.to_string(),
            requested_by: self.operator.user_id,
            payload,
        };
        let replacement = self.backend.replace_child(kind, child_id, &request).await?;
        info!(
            %kind,
            superseded = %child_id,
            replacement = %replacement.child_id,
            reason,
            "record replaced"
        );
        self.refresh_if_open(kind).await;
        Ok(replacement)
    }

    /// Dispenses a signed prescription or completes a signed order.
    pub async fn fulfil_child(
        &mut self,
        child_id: ChildId,
        kind: ChildKind,
    ) -> WorkflowResult<ChildRecord> {
        if kind.fulfilment_status().is_none() {
            return Err(WorkflowError::validation(format!(
                "{kind} records cannot be dispensed or completed"
            )));
        }

        let current = self.backend.fetch_child(kind, child_id).await?;
        if !current.status.can_fulfil(kind) {
            return Err(WorkflowError::conflict(format!(
                "{kind} {child_id} is {}; only signed records can be fulfilled",
                current.status
            )));
        }

        let request = FulfilRequest {
            performed_by: self.operator.user_id,
        };
        let fulfilled = self.backend.fulfil_child(kind, child_id, &request).await?;
        info!(%kind, %child_id, status = %fulfilled.status, "record fulfilled");
        self.refresh_if_open(kind).await;
        Ok(fulfilled)
    }

    pub async fn cancel_child(
        &mut self,
        child_id: ChildId,
        kind: ChildKind,
        reason: &str,
    ) -> WorkflowResult<ChildRecord> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::validation("a reason is required to cancel a record"));
        }

        let current = self.backend.fetch_child(kind, child_id).await?;
        if !current.status.can_cancel() {
            return Err(WorkflowError::conflict(format!(
                "{kind} {child_id} is already {}",
                current.status
            )));
        }

        let request = CancelRequest {
            reason: reason.to_string(),
            performed_by: self.operator.user_id,
        };
        let cancelled = self.backend.cancel_child(kind, child_id, &request).await?;
        info!(%kind, %child_id, reason, "record cancelled");
        self.refresh_if_open(kind).await;
        Ok(cancelled)
    }

    /// Version history for audit display, oldest first. A record that was
    /// never replaced may come back as an empty chain.
    pub async fn replacement_chain(
        &self,
        child_id: ChildId,
        kind: ChildKind,
    ) -> WorkflowResult<ReplacementChain> {
        let versions = self.backend.replacement_history(kind, child_id).await?;
        Ok(ReplacementChain::from_versions(versions)?)
    }

    fn ensure_parent(&self, parent_id: &EncounterId) -> WorkflowResult<()> {
        match &self.parent {
            Some(parent) if &parent.encounter_id == parent_id => Ok(()),
            Some(parent) => Err(WorkflowError::validation(format!(
                "encounter {parent_id} is not the resolved encounter {}",
                parent.encounter_id
            ))),
            None => Err(WorkflowError::validation(format!(
                "encounter {parent_id} has not been resolved"
            ))),
        }
    }

    fn clear_children(&mut self) {
        self.children.clear();
        self.open_list = None;
    }

    async fn refresh_if_open(&mut self, kind: ChildKind) {
        if self.open_list != Some(kind) {
            return;
        }
        let Some(encounter_id) = self.parent.as_ref().map(|p| p.encounter_id.clone()) else {
            return;
        };

        match self.backend.list_children(&encounter_id, kind).await {
            Ok(records) => {
                self.children.insert(kind, records);
            }
            Err(error) => {
                warn!(%encounter_id, %kind, %error, "failed to refresh open record list");
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
