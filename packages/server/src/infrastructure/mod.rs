//! Infrastructure 層
//!
//! ドメイン層の trait の具体的な実装と、ワイヤーフォーマットの DTO を提供します。

pub mod broadcast;
pub mod dto;
pub mod profile;
pub mod repository;
