pub mod app;
pub mod client;
pub mod detail;
pub mod mod_info;
pub mod route;
pub mod sections;
pub mod store;
pub mod summary;
pub mod ui;

pub use app::{BrowserSession, SeedBrowserApp};
pub use client::{ClientError, LocalSeedClient, PendingFetch, SeedClient, TcpSeedClient};
pub use detail::{is_ready, DetailPhase, DetailRender, LoadedDetail, SectionState, SeedDetailView};
pub use route::{RouteError, RouteParams};
pub use sections::SectionKind;
pub use store::{BrowserStore, FailedFetch, FetchFailure, SeedDispatch, SeedReader, StoreSnapshot};
pub use summary::SeedSummary;
