mod cursor;
mod result_set;
mod row;

pub use cursor::VecCursor;
pub use result_set::ResultSet;
pub use row::RowResult;
