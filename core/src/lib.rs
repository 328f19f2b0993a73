pub mod clock;
pub mod codec;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod ids;
pub mod protocol;
pub mod router;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod submission;
pub mod time;
pub mod view;

pub use codec::{decode, encode};
pub use config::{NetDelayConfig, SyncConfig};
pub use connection::{handshake, Backoff, ConnectionState, ConnectionStatus};
pub use endpoint::{answer_url, live_socket_url, live_socket_url_with_base, EndpointError};
pub use ids::{AnnouncementId, GuessUid, HintUid, UnlockUid};
pub use protocol::{decode_event, BackfillFrom, ClientRequest, EventKind, ProtocolError, ServerEvent};
pub use router::{route, RouteError, Routed};
pub use session::{Notice, NoticeLevel, PuzzleSession, SessionUpdate};
pub use snapshot::{SessionSnapshot, SnapshotError, SESSION_SNAPSHOT_VERSION};
pub use store::{Change, PuzzleStores, StoreError, StoreKind};
pub use submission::{
    interpret_answer_response, AnswerRequest, AnswerResponse, SolvedSignal, SubmissionPhase,
    SubmitError, SubmitRejected,
};
pub use time::EventTime;
pub use view::PageView;
