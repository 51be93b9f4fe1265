mod link_codec;
mod network_codec;
mod nodes;
mod sim_time;
mod support;
mod trace;
