// Route table: path → prompt template → model
pub mod factory;
pub mod table;
pub mod template;

pub use factory::RouteTableFactory;
pub use table::{Route, RouteTable};
pub use template::PromptTemplate;
