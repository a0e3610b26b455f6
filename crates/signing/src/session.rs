//! Signing session: zone bookkeeping from detection to commit
//!
//! ```text
//! Detecting ──load──▶ Ready ──begin_finalize──▶ Committing ──▶ Committed
//!                       ▲                            │
//!                       └──── edit ──── Failed ◀─────┘
//! ```
//!
//! Zones are keyed by [`ZoneId`] with a separate display order, so fills are
//! point updates.

use crate::compositor::{Placement, SignaturePlacement};
use crate::coords::UiPoint;
use crate::scanner::{scan_or_empty, ScanConfig};
use crate::zone::{SignatureImage, SignatureZone, ZoneId};
use crate::{GatewayError, SessionError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

type SessionResult<T> = std::result::Result<T, SessionError>;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Waiting for zones
    Detecting,
    /// Zones loaded; fill, place and batch-sign allowed
    Ready,
    /// Placements handed to the gateway
    Committing,
    /// Signed document persisted; zones discarded
    Committed,
    /// Commit failed; zones kept for a retry
    Failed,
}

/// Half of the page a zone sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// `x < 50` is left, everything else (including exactly 50) is right
    pub fn of(x_pct: f64) -> Self {
        if x_pct < 50.0 {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// Fetches documents and persists signed results
pub trait DocumentGateway {
    /// What a successful update returns (typically the updated document)
    type Record;

    /// Raw PDF bytes of a document
    fn fetch(&mut self, document_id: &str) -> std::result::Result<Vec<u8>, GatewayError>;

    /// Composite the placements into the document and persist the result
    fn submit(
        &mut self,
        document_id: &str,
        placements: &[SignaturePlacement],
    ) -> std::result::Result<Self::Record, GatewayError>;
}

/// Zones of one document being signed
#[derive(Debug)]
pub struct SigningSession {
    document_id: String,
    state: SessionState,
    zones: HashMap<ZoneId, SignatureZone>,
    order: Vec<ZoneId>,
}

impl SigningSession {
    /// Start a session in `Detecting`
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            state: SessionState::Detecting,
            zones: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Fetch the document and scan it for tags
    ///
    /// A failed fetch is an error. A failed scan is not: the session starts
    /// with no zones and the signer can still place them by hand.
    pub fn open<G: DocumentGateway>(
        document_id: impl Into<String>,
        gateway: &mut G,
        config: &ScanConfig,
    ) -> SessionResult<Self> {
        let mut session = Self::new(document_id);
        let pdf = gateway
            .fetch(&session.document_id)
            .map_err(SessionError::FetchFailed)?;
        session.load_zones(scan_or_empty(&pdf, config))?;
        Ok(session)
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Replace the zone list with detected zones and become `Ready`
    pub fn load_zones(&mut self, zones: Vec<SignatureZone>) -> SessionResult<()> {
        if self.state != SessionState::Detecting {
            return Err(SessionError::InvalidState(self.state));
        }

        self.zones.clear();
        self.order.clear();
        for zone in zones {
            self.insert(zone);
        }
        self.state = SessionState::Ready;

        tracing::debug!(document_id = %self.document_id, zones = self.order.len(), "zones loaded");
        Ok(())
    }

    /// Zones in display order
    pub fn zones(&self) -> impl Iterator<Item = &SignatureZone> + '_ {
        self.order.iter().filter_map(|id| self.zones.get(id))
    }

    pub fn zone(&self, id: ZoneId) -> Option<&SignatureZone> {
        self.zones.get(&id)
    }

    pub fn filled_count(&self) -> usize {
        self.zones.values().filter(|z| z.is_filled()).count()
    }

    /// Put an image in a zone, replacing any previous one
    pub fn fill_zone(&mut self, id: ZoneId, image: SignatureImage) -> SessionResult<()> {
        self.ensure_editable()?;
        let zone = self
            .zones
            .get_mut(&id)
            .ok_or(SessionError::UnknownZone(id))?;
        zone.content = Some(image);
        self.mark_edited();
        Ok(())
    }

    /// Empty a zone
    pub fn clear_zone(&mut self, id: ZoneId) -> SessionResult<()> {
        self.ensure_editable()?;
        let zone = self
            .zones
            .get_mut(&id)
            .ok_or(SessionError::UnknownZone(id))?;
        zone.content = None;
        self.mark_edited();
        Ok(())
    }

    /// Put one image in every empty zone on one side of the page
    ///
    /// Returns how many zones were filled. Zones that already hold a
    /// signature keep it.
    pub fn fill_side(&mut self, side: Side, image: SignatureImage) -> SessionResult<usize> {
        self.ensure_editable()?;

        let mut filled = 0;
        for id in &self.order {
            if let Some(zone) = self.zones.get_mut(id) {
                if !zone.is_filled() && Side::of(zone.position.x) == side {
                    zone.content = Some(image.clone());
                    filled += 1;
                }
            }
        }

        self.mark_edited();
        tracing::debug!(?side, filled, "batch signed");
        Ok(filled)
    }

    /// Add a zone by hand
    ///
    /// The page index is not checked here; zones on missing pages are
    /// dropped when the document is composited.
    pub fn place_zone(
        &mut self,
        page_index: usize,
        position: UiPoint,
        image: Option<SignatureImage>,
    ) -> SessionResult<ZoneId> {
        self.ensure_editable()?;

        let mut zone = SignatureZone::new(page_index, position);
        zone.content = image;
        let id = zone.id;
        self.insert(zone);
        self.mark_edited();
        Ok(id)
    }

    /// Validate and enter `Committing`
    ///
    /// Returns the placements to submit, in display order. With no filled
    /// zone this fails with [`SessionError::NothingToSign`] and the state is
    /// left as it was.
    pub fn begin_finalize(&mut self) -> SessionResult<Vec<SignaturePlacement>> {
        if !matches!(self.state, SessionState::Ready | SessionState::Failed) {
            return Err(SessionError::InvalidState(self.state));
        }

        let placements: Vec<SignaturePlacement> = self
            .zones()
            .filter_map(Placement::from_zone)
            .map(|p| SignaturePlacement::from(&p))
            .collect();
        if placements.is_empty() {
            return Err(SessionError::NothingToSign);
        }

        self.state = SessionState::Committing;
        Ok(placements)
    }

    /// The gateway accepted the placements; discard the zones
    pub fn complete_finalize(&mut self) -> SessionResult<()> {
        if self.state != SessionState::Committing {
            return Err(SessionError::InvalidState(self.state));
        }
        self.zones.clear();
        self.order.clear();
        self.state = SessionState::Committed;
        Ok(())
    }

    /// The gateway failed; keep the zones for a retry
    pub fn fail_finalize(&mut self) -> SessionResult<()> {
        if self.state != SessionState::Committing {
            return Err(SessionError::InvalidState(self.state));
        }
        self.state = SessionState::Failed;
        Ok(())
    }

    /// Submit every filled zone in one update request
    pub fn finalize<G: DocumentGateway>(&mut self, gateway: &mut G) -> SessionResult<G::Record> {
        let placements = self.begin_finalize()?;

        match gateway.submit(&self.document_id, &placements) {
            Ok(record) => {
                self.complete_finalize()?;
                tracing::info!(
                    document_id = %self.document_id,
                    signatures = placements.len(),
                    "document signed"
                );
                Ok(record)
            }
            Err(e) => {
                self.fail_finalize()?;
                tracing::warn!(document_id = %self.document_id, error = %e, "signing failed");
                Err(SessionError::CommitFailed(e))
            }
        }
    }

    fn insert(&mut self, zone: SignatureZone) {
        let id = zone.id;
        if self.zones.insert(id, zone).is_none() {
            self.order.push(id);
        }
    }

    /// Editing is allowed while `Ready` and after a failed commit
    fn ensure_editable(&self) -> SessionResult<()> {
        match self.state {
            SessionState::Ready | SessionState::Failed => Ok(()),
            other => Err(SessionError::InvalidState(other)),
        }
    }

    /// A successful edit after a failed commit returns the session to `Ready`
    fn mark_edited(&mut self) {
        if self.state == SessionState::Failed {
            self.state = SessionState::Ready;
        }
    }
}
