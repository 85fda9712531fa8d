//! Built-in step definitions.
//!
//! Available to every feature run through [`run_features`](crate::run_features):
//!
//! ```gherkin
//! Given I navigate to "/login"
//! Given I open the "login" page
//! Then the "login" page is displayed correctly
//! Then all elements of the "login" page are visible
//! When I click on "help" in the "login" page
//! When I type "alice" into "username" in the "login" page
//! Then the "error" element of the "login" page is visible
//! When I switch to the "popup" window
//! Then the "popup" window is open
//! Then the "popup" window is not open
//! Given the window timeout is 3000 milliseconds
//! When I take a screenshot
//! ```

use crate::result::{HarnessError, HarnessResult};
use crate::wait::WaitCondition;
use crate::world::BrowserWorld;
use cucumber::{given, then, when};

/// Referenced by the runner so the step registrations in this object are linked
#[inline(never)]
pub(crate) fn ensure_linked() {}

#[given(expr = "I navigate to {string}")]
async fn navigate_to(world: &mut BrowserWorld, url: String) -> HarnessResult<()> {
    world.navigate(&url).await
}

#[given(expr = "I open the {string} page")]
async fn open_page(world: &mut BrowserWorld, page: String) -> HarnessResult<()> {
    world.open_page(&page).await
}

#[then(expr = "the {string} page is displayed correctly")]
async fn page_displayed_correctly(world: &mut BrowserWorld, page: String) -> HarnessResult<()> {
    world.is_displayed_correctly(&page).await
}

#[then(expr = "all elements of the {string} page are visible")]
async fn all_elements_visible(world: &mut BrowserWorld, page: String) -> HarnessResult<()> {
    world.are_all_elements_visible(&page).await
}

#[when(expr = "I click on {string} in the {string} page")]
async fn click_on(world: &mut BrowserWorld, element: String, page: String) -> HarnessResult<()> {
    world.click(&page, &element).await
}

#[when(expr = "I type {string} into {string} in the {string} page")]
async fn type_into(
    world: &mut BrowserWorld,
    text: String,
    element: String,
    page: String,
) -> HarnessResult<()> {
    world.type_into(&page, &element, &text).await
}

#[then(expr = "the {string} element of the {string} page is visible")]
async fn element_visible(world: &mut BrowserWorld, element: String, page: String) -> HarnessResult<()> {
    let locator = world.harness()?.pages.locator(&page, &element)?.clone();
    match world.wait_for(&WaitCondition::Visible(locator)).await {
        Ok(_) => Ok(()),
        Err(HarnessError::Timeout { .. }) => Err(HarnessError::assertion(format!(
            "{page} - The {element} element is not displayed correctly!"
        ))),
        Err(e) => Err(e),
    }
}

#[when(expr = "I switch to the {string} window")]
async fn switch_to_window(world: &mut BrowserWorld, name: String) -> HarnessResult<()> {
    world.switch_to_window(&name).await.map(drop)
}

#[then(expr = "the {string} window is open")]
async fn window_is_open(world: &mut BrowserWorld, name: String) -> HarnessResult<()> {
    if world.is_window_open(&name).await? {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!("The {name} window is not open")))
    }
}

#[then(expr = "the {string} window is not open")]
async fn window_is_not_open(world: &mut BrowserWorld, name: String) -> HarnessResult<()> {
    if world.is_window_open(&name).await? {
        Err(HarnessError::assertion(format!("The {name} window is open")))
    } else {
        Ok(())
    }
}

#[given(expr = "the window timeout is {int} milliseconds")]
async fn window_timeout(world: &mut BrowserWorld, ms: u64) {
    world.set_default_timeout(ms);
}

#[when(expr = "I take a screenshot")]
async fn take_screenshot(world: &mut BrowserWorld) -> HarnessResult<()> {
    world.take_screenshot().await.map(drop)
}
