use serde::Serialize;

use crate::region::RegionId;

/// An independent dashboard widget that can start generative jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Widget {
    CoPilot,
    Insights,
    PlatformGuide,
    Allocation,
    TraderAnalysis,
    StudioImage,
    StudioVideo,
    StudioEdit,
}

impl Widget {
    pub const ALL: [Widget; 8] = [
        Widget::CoPilot,
        Widget::Insights,
        Widget::PlatformGuide,
        Widget::Allocation,
        Widget::TraderAnalysis,
        Widget::StudioImage,
        Widget::StudioVideo,
        Widget::StudioEdit,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Widget::CoPilot => "co-pilot",
            Widget::Insights => "insights",
            Widget::PlatformGuide => "platform-guide",
            Widget::Allocation => "allocation",
            Widget::TraderAnalysis => "trader-analysis",
            Widget::StudioImage => "studio-image",
            Widget::StudioVideo => "studio-video",
            Widget::StudioEdit => "studio-edit",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|widget| widget.slug() == slug)
    }

    /// The display region this widget renders into.
    pub fn region(self) -> RegionId {
        match self {
            Widget::CoPilot => RegionId::CoPilotMessages,
            Widget::Insights => RegionId::InsightsPanel,
            Widget::PlatformGuide => RegionId::GuidePanel,
            Widget::Allocation => RegionId::AllocationPanel,
            Widget::TraderAnalysis => RegionId::TraderPanel,
            Widget::StudioImage | Widget::StudioVideo | Widget::StudioEdit => RegionId::StudioOutput,
        }
    }

    /// Label under which this widget's failures appear in the error log.
    pub fn context_label(self) -> &'static str {
        match self {
            Widget::CoPilot => "Co-Pilot",
            Widget::Insights => "Strategic Insights",
            Widget::PlatformGuide => "Platform Guide",
            Widget::Allocation => "Asset Allocation",
            Widget::TraderAnalysis => "Social Trading",
            Widget::StudioImage | Widget::StudioVideo | Widget::StudioEdit => "AI Studio",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_round_trip() {
        for widget in Widget::ALL {
            assert_eq!(Widget::from_slug(widget.slug()), Some(widget));
        }
        assert_eq!(Widget::from_slug("auth-modal"), None);
    }

    #[test]
    fn studio_widgets_share_one_region() {
        assert_eq!(Widget::StudioImage.region(), Widget::StudioVideo.region());
        assert_eq!(Widget::StudioImage.region(), Widget::StudioEdit.region());
        assert_ne!(Widget::Insights.region(), Widget::PlatformGuide.region());
    }
}
