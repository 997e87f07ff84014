pub mod consensus;
pub mod data_prep;
pub mod introduction;
pub mod persian_date;
pub mod reporter;
pub mod schema;
pub mod worker;

pub use consensus::{fundamental_consensus, social_news_consensus, technical_consensus, ConsensusNode};
pub use data_prep::DataPrepNode;
pub use introduction::{after_input, should_continue, InputNode, IntroAgentNode, ToolNode};
pub use reporter::ReporterNode;
pub use worker::{
    balance_sheet_worker, codal_worker, earnings_quality_worker, news_worker, oscillator_worker,
    sahamyab_worker, smart_money_worker, support_resistance_worker, trend_worker, twitter_worker,
    valuation_worker, volatility_worker, volume_worker, CodalWorkerNode, StructuredWorkerNode,
};
