pub mod batch;
pub mod brief;
pub mod provider;
pub mod verification;

pub use batch::{BatchEvent, GenerationBatch, Selection};
pub use brief::{FlyerBrief, Mode, DEFAULT_VIBE};
pub use provider::{
    ErrorBody, ExportPayload, ExportRequest, GenerationPayload, GenerationRequest, ProviderReply,
    VerifyPayload, VerifyRequest,
};
pub use verification::{ExpectedFields, MissingField, VerificationStatus};
