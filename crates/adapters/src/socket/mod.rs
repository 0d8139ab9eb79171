pub mod socket_table;
