pub mod exam_enrolment;
pub mod exam_participation;
pub mod reservation;
