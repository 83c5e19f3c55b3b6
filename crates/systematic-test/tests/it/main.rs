mod s1_data_race;
mod s2_deadlock;
mod s3_liveness;
mod s4_state_inheritance;
mod s5_when_any_fault;
mod s6_interleaving_coverage;
