use std::collections::BTreeMap;

use serde::Serialize;

use crate::job::JobId;
use crate::request::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionId {
    CoPilotMessages,
    InsightsPanel,
    GuidePanel,
    AllocationPanel,
    TraderPanel,
    StudioOutput,
}

impl RegionId {
    pub const ALL: [RegionId; 6] = [
        RegionId::CoPilotMessages,
        RegionId::InsightsPanel,
        RegionId::GuidePanel,
        RegionId::AllocationPanel,
        RegionId::TraderPanel,
        RegionId::StudioOutput,
    ];
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "content", rename_all = "snake_case")]
pub enum RenderState {
    #[default]
    Empty,
    Loading,
    Content(Payload),
    Error(String),
}

/// Identifies one attempt to fill a region. Issued values are unique for the
/// lifetime of the reconciler and also serve as the job id of that attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RenderToken(u64);

impl RenderToken {
    pub fn job_id(self) -> JobId {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct RegionSlot {
    state: RenderState,
    latest: Option<RenderToken>,
}

/// Token-gated render state for every display region.
///
/// Only the most recently issued token of a region may change what that region
/// shows; anything carrying an older token is discarded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciler {
    regions: BTreeMap<RegionId, RegionSlot>,
    last_issued: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, region: RegionId) -> RenderToken {
        self.last_issued += 1;
        let token = RenderToken(self.last_issued);
        let slot = self.regions.entry(region).or_default();
        slot.state = RenderState::Loading;
        slot.latest = Some(token);
        token
    }

    pub fn commit(&mut self, region: RegionId, token: RenderToken, content: Payload) -> bool {
        match self.current_slot_mut(region, token) {
            Some(slot) => {
                slot.state = RenderState::Content(content);
                true
            }
            None => false,
        }
    }

    pub fn fail(&mut self, region: RegionId, token: RenderToken, message: impl Into<String>) -> bool {
        match self.current_slot_mut(region, token) {
            Some(slot) => {
                slot.state = RenderState::Error(message.into());
                true
            }
            None => false,
        }
    }

    /// Extends the streamed text shown for the current attempt.
    pub fn append(&mut self, region: RegionId, token: RenderToken, delta: &str) -> bool {
        let Some(slot) = self.current_slot_mut(region, token) else {
            return false;
        };
        match &mut slot.state {
            RenderState::Content(Payload::Text(text)) => text.push_str(delta),
            state @ (RenderState::Empty | RenderState::Loading) => {
                *state = RenderState::Content(Payload::Text(delta.to_string()));
            }
            RenderState::Content(_) | RenderState::Error(_) => return false,
        }
        true
    }

    /// Clears the region and invalidates every token issued for it.
    pub fn reset(&mut self, region: RegionId) {
        self.regions.insert(region, RegionSlot::default());
    }

    pub fn state(&self, region: RegionId) -> &RenderState {
        const EMPTY: &RenderState = &RenderState::Empty;
        self.regions.get(&region).map_or(EMPTY, |slot| &slot.state)
    }

    pub fn is_current(&self, region: RegionId, token: RenderToken) -> bool {
        self.regions
            .get(&region)
            .is_some_and(|slot| slot.latest == Some(token))
    }

    fn current_slot_mut(&mut self, region: RegionId, token: RenderToken) -> Option<&mut RegionSlot> {
        self.regions
            .get_mut(&region)
            .filter(|slot| slot.latest == Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MediaData;

    const REGION: RegionId = RegionId::StudioOutput;

    #[test]
    fn begin_marks_loading_and_clears_content() {
        let mut reconciler = Reconciler::new();
        let first = reconciler.begin(REGION);
        assert!(reconciler.commit(REGION, first, Payload::Text("old".into())));

        let second = reconciler.begin(REGION);
        assert_ne!(first, second);
        assert_eq!(reconciler.state(REGION), &RenderState::Loading);
    }

    #[test]
    fn stale_commit_and_fail_are_discarded() {
        let mut reconciler = Reconciler::new();
        let slow = reconciler.begin(REGION);
        let fast = reconciler.begin(REGION);

        assert!(reconciler.commit(REGION, fast, Payload::Text("fresh".into())));
        assert!(!reconciler.commit(REGION, slow, Payload::Text("stale".into())));
        assert!(!reconciler.fail(REGION, slow, "stale failure"));

        assert_eq!(
            reconciler.state(REGION),
            &RenderState::Content(Payload::Text("fresh".into()))
        );
    }

    #[test]
    fn last_issued_wins_for_any_completion_order() {
        // Completion orders for three attempts; the last-issued content must win every time.
        let orders: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for order in orders {
            let mut reconciler = Reconciler::new();
            let tokens: Vec<_> = (0..3).map(|_| reconciler.begin(REGION)).collect();
            for idx in order {
                reconciler.commit(REGION, tokens[idx], Payload::Text(format!("job {idx}")));
            }
            assert_eq!(
                reconciler.state(REGION),
                &RenderState::Content(Payload::Text("job 2".into())),
                "order {order:?}"
            );
        }
    }

    #[test]
    fn tokens_do_not_cross_regions() {
        let mut reconciler = Reconciler::new();
        let insights = reconciler.begin(RegionId::InsightsPanel);
        let _guide = reconciler.begin(RegionId::GuidePanel);

        assert!(!reconciler.commit(RegionId::GuidePanel, insights, Payload::Text("x".into())));
        assert!(reconciler.commit(RegionId::InsightsPanel, insights, Payload::Text("y".into())));
        assert_eq!(reconciler.state(RegionId::GuidePanel), &RenderState::Loading);
    }

    #[test]
    fn append_builds_text_and_respects_staleness() {
        let mut reconciler = Reconciler::new();
        let old = reconciler.begin(RegionId::CoPilotMessages);
        let token = reconciler.begin(RegionId::CoPilotMessages);

        assert!(reconciler.append(RegionId::CoPilotMessages, token, "Hel"));
        assert!(reconciler.append(RegionId::CoPilotMessages, token, "lo"));
        assert!(!reconciler.append(RegionId::CoPilotMessages, old, "!!"));
        assert_eq!(
            reconciler.state(RegionId::CoPilotMessages),
            &RenderState::Content(Payload::Text("Hello".into()))
        );
    }

    #[test]
    fn append_does_not_overwrite_media() {
        let mut reconciler = Reconciler::new();
        let token = reconciler.begin(REGION);
        reconciler.commit(REGION, token, Payload::Image(MediaData::new("image/png", "AAAA")));
        assert!(!reconciler.append(REGION, token, "text"));
    }

    #[test]
    fn reset_empties_region_and_invalidates_tokens() {
        let mut reconciler = Reconciler::new();
        let token = reconciler.begin(REGION);
        reconciler.reset(REGION);

        assert_eq!(reconciler.state(REGION), &RenderState::Empty);
        assert!(!reconciler.is_current(REGION, token));
        assert!(!reconciler.commit(REGION, token, Payload::Text("late".into())));
    }

    #[test]
    fn unseen_regions_are_empty() {
        let reconciler = Reconciler::new();
        for region in RegionId::ALL {
            assert_eq!(reconciler.state(region), &RenderState::Empty);
        }
    }
}
