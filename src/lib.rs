pub mod addr;
pub mod error;
pub mod net;
pub mod pipeline;
pub mod proto;
pub mod sim;
pub mod topo;
pub mod trace;

#[cfg(test)]
mod test;
