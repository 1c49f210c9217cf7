pub mod device_detail;
pub mod device_list;
pub mod popups;
