pub mod gossip;
pub mod report;
