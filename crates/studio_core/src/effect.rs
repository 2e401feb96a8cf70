#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Submit {
        job_id: crate::JobId,
        request: crate::GenerationRequest,
    },
    Cancel {
        job_id: crate::JobId,
    },
}
