pub mod db;
pub mod earningdb;
pub mod jobdb;
pub mod paymentdb;
pub mod payout_accountdb;
pub mod supervisor;
pub mod userdb;

#[cfg(test)]
pub mod memory;
