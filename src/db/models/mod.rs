mod freelancer;
mod meeting;
mod mentor;
mod project;
mod user;

pub use freelancer::*;
pub use meeting::*;
pub use mentor::*;
pub use project::*;
pub use user::*;
