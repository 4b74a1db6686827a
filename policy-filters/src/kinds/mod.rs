pub mod counter;
pub mod greylist;
pub mod hang;
pub mod match_filter;
pub mod rate;
pub mod spf_kind;
pub mod srs;
pub mod strlist;
