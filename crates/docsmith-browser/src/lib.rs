pub mod launcher;
pub mod webdriver;

pub use launcher::{chromedriver_running, start_chrome, ChromeSession, DriverProcess};
pub use webdriver::{
    chrome::{ChromeDriver, ChromeOptions},
    WebDriverController, WebElement,
};
