pub mod gas;
pub mod quantum;
pub mod ring;
pub mod summary;
pub mod touschek;
pub mod touschek_table;

mod errors;

pub use errors::LossRateError;
pub use gas::{
    ElasticInput, InelasticInput, ResidualGas, calc_elastic_loss_rate, calc_inelastic_loss_rate,
};
pub use quantum::{
    LongitudinalQuantumInput, QuantumInput, QuantumLossRates, TransverseQuantumInput,
    calc_quantum_loss_rate_longitudinal, calc_quantum_loss_rates,
    calc_quantum_loss_rates_transverse, quantum_loss_rate,
};
pub use ring::{
    AcceptanceProfile, RingError, RingOptics, RingTouschekResult, touschek_inverse_lifetime,
    touschek_inverse_lifetime_with_table,
};
pub use summary::{LifetimeSummary, LossContribution, summarize_loss_rates};
pub use touschek::{
    TouschekBeam, TouschekInput, TouschekOptics, calc_touschek_loss_rate,
    calc_touschek_loss_rate_with_table,
};
pub use touschek_table::{
    DTableError, DTableIoError, DTouschekLookup, DTouschekTable, d_touschek, default_table,
};
