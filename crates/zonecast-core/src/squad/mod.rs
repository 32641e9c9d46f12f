pub mod best_xi;
pub mod player;
pub mod roles;
