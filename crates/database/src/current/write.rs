use crate::DieselConnection;

pub mod sanction;

pub struct CurrentWriteCommands<'a> {
    conn: &'a mut DieselConnection,
}

impl<'a> CurrentWriteCommands<'a> {
    pub fn new(conn: &'a mut DieselConnection) -> Self {
        Self { conn }
    }

    pub fn sanction(self) -> sanction::CurrentWriteSanction<'a> {
        sanction::CurrentWriteSanction::new(self.conn)
    }
}
