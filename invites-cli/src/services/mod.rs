// Business logic services layer
//
// Reconciliation of the invite sheet, independent of the store backing it.

pub mod reconcile;

pub use reconcile::InviteService;
