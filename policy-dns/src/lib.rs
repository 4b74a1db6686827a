//! Asynchronous DNS gateway (spec §4.2): one process-wide resolver
//! context, normalized to a three-state `Found`/`NotFound`/`Error`
//! outcome for every RR type the SPF evaluator and the strlist/RHBL
//! filter need (A, AAAA, MX, TXT, the historical SPF RR type 99, and
//! PTR). Built over `async-std-resolver`, the same resolver construction
//! (`resolver_from_system_conf`) `yuubind::main` uses.

mod gateway;
mod query;

pub use gateway::DnsGateway;
pub use query::{CheckOutcome, DnsQuery, RecordData};
