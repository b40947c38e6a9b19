pub mod export_saft;
pub mod seal_order;
pub mod verify_ledger;

pub use export_saft::{ExportSaftCommand, ExportSaftResponse, ExportSaftUseCase};
pub use seal_order::{SealOrderCommand, SealOrderLineDto, SealOrderResponse, SealOrderUseCase};
pub use verify_ledger::{VerifyLedgerResponse, VerifyLedgerUseCase};
