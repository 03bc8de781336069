pub mod browse;
pub mod crawl;
pub mod hubs;
pub mod map;
pub mod metamodel;
pub mod search;
pub mod versions;
