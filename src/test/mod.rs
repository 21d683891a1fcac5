mod support;

mod binding;
mod registry;
mod sim_time;
