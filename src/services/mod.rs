//! Business logic services

pub mod participation_service;
pub mod quiz_participation_service;

pub use participation_service::ParticipationService;
pub use quiz_participation_service::QuizParticipationService;
