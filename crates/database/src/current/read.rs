use crate::DieselConnection;

pub mod sanction;

pub struct CurrentReadCommands<'a> {
    conn: &'a mut DieselConnection,
}

impl<'a> CurrentReadCommands<'a> {
    pub fn new(conn: &'a mut DieselConnection) -> Self {
        Self { conn }
    }

    pub fn sanction(self) -> sanction::CurrentReadSanction<'a> {
        sanction::CurrentReadSanction::new(self.conn)
    }
}
