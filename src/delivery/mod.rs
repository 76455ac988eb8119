// ============================================================================
// Delivery Domain - joins order facts and retires delivered orders
// ============================================================================
//
// - state      - OrderState, PreparedFact, Lifecycle, ReadyEmission
// - store      - StateStore (sharded concurrent map)
// - correlator - join attempt and manual delivery
// - sweeper    - optional TTL eviction task
// - errors     - DeliveryError
//
// ============================================================================

pub mod state;
pub mod store;
pub mod correlator;
pub mod sweeper;
pub mod errors;

pub use state::*;
pub use store::*;
pub use correlator::*;
pub use sweeper::*;
pub use errors::*;
