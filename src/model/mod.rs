pub mod department;
pub mod employee;
pub mod leave;
pub mod role;
pub mod salary;
pub mod user;
