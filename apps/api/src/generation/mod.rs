// Portfolio generation pipeline: the section generators, the website URL
// resolver they share, the job orchestrator, and the HTTP surface.
// All GitHub calls go through the github module — no direct API calls here.

pub mod handlers;
pub mod orchestrator;
pub mod sections;
pub mod website;
