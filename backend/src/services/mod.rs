pub mod channel;
pub mod cutoff;
pub mod harvester;
pub mod link_log;
pub mod locks;
pub mod pipeline;
pub mod sheets;
pub mod status;
pub mod throttle;
pub mod youtube;
